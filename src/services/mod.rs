//! services/mod.rs
//! Módulo que agrupa las capas de negocio de la academia.

pub mod chat_service;
pub mod email_service;
pub mod grading_queue;
pub mod grading_service;
pub mod income_service;
pub mod prereg_service;
pub mod quiz_service;
pub mod student_service;

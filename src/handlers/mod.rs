//! handlers/mod.rs
//! Módulo que agrupa los handlers HTTP de cada dominio.

pub mod chat_handler;
pub mod email_handler;
pub mod grading_handler;
pub mod income_handler;
pub mod prereg_handler;
pub mod quiz_handler;
pub mod student_handler;

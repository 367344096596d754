//! models/mod.rs
//! Módulo raíz para modelos/estructuras compartidas.

pub mod chat_model;
pub mod email_model;
pub mod grading_model;
pub mod income_model;
pub mod prereg_model;
pub mod quiz_model;
pub mod student_model;

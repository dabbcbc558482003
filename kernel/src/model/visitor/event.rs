use crate::model::visitor::AccessMode;
use derive_new::new;

#[derive(Debug, Clone, new)]
pub struct NewVisitor {
    pub full_name: String,
    pub document_id: Option<String>,
    pub access_mode: AccessMode,
}

use super::parse_column;
use kernel::model::{
    id::{FamilyId, ResidentId},
    resident::Resident,
};
use shared::error::AppError;

#[derive(sqlx::FromRow)]
pub struct ResidentRow {
    pub resident_id: ResidentId,
    pub family_id: Option<FamilyId>,
    pub full_name: String,
    pub document_id: Option<String>,
    pub role: String,
    pub kind: String,
    pub is_active: bool,
    pub can_open_gate: bool,
    pub can_open_door: bool,
    pub can_issue_pedestrian_qr: bool,
    pub can_issue_vehicular_qr: bool,
    pub can_reserve_amenities: bool,
}

impl TryFrom<ResidentRow> for Resident {
    type Error = AppError;

    fn try_from(value: ResidentRow) -> Result<Self, Self::Error> {
        let ResidentRow {
            resident_id,
            family_id,
            full_name,
            document_id,
            role,
            kind,
            is_active,
            can_open_gate,
            can_open_door,
            can_issue_pedestrian_qr,
            can_issue_vehicular_qr,
            can_reserve_amenities,
        } = value;
        Ok(Resident {
            resident_id,
            family_id,
            full_name,
            document_id,
            role: parse_column("residents.role", &role)?,
            kind: parse_column("residents.kind", &kind)?,
            is_active,
            can_open_gate,
            can_open_door,
            can_issue_pedestrian_qr,
            can_issue_vehicular_qr,
            can_reserve_amenities,
        })
    }
}

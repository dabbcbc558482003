use crate::model::{
    id::{FamilyId, ResidentId},
    role::Role,
    visitor::AccessMode,
};
use strum::{AsRefStr, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ResidentKind {
    Principal,
    Member,
}

// 住民・家族の管理は外部システムの責務。ここでは認可判定に必要な項目だけを読む。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resident {
    pub resident_id: ResidentId,
    pub family_id: Option<FamilyId>,
    pub full_name: String,
    // 顔認証端末は身分証番号で住民を引く
    pub document_id: Option<String>,
    pub role: Role,
    pub kind: ResidentKind,
    pub is_active: bool,
    pub can_open_gate: bool,
    pub can_open_door: bool,
    pub can_issue_pedestrian_qr: bool,
    pub can_issue_vehicular_qr: bool,
    pub can_reserve_amenities: bool,
}

impl Resident {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    fn is_privileged(&self) -> bool {
        self.is_admin() || self.kind == ResidentKind::Principal
    }

    pub fn may_issue_for(&self, mode: AccessMode) -> bool {
        if self.is_privileged() {
            return true;
        }
        match mode {
            AccessMode::Pedestrian => self.can_issue_pedestrian_qr,
            AccessMode::Vehicular => self.can_issue_vehicular_qr,
        }
    }

    pub fn may_reserve_amenities(&self) -> bool {
        self.is_admin() || self.can_reserve_amenities
    }

    pub fn may_operate(&self, gate: GateKind) -> bool {
        if self.is_privileged() {
            return true;
        }
        match gate {
            GateKind::Vehicular => self.can_open_gate,
            GateKind::Pedestrian => self.can_open_door,
        }
    }

    /// Whether the resident may act on a record owned by `family_id`.
    pub fn may_manage_family(&self, family_id: Option<FamilyId>) -> bool {
        self.is_admin() || (self.family_id.is_some() && self.family_id == family_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum GateKind {
    Vehicular,
    Pedestrian,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn member() -> Resident {
        Resident {
            resident_id: ResidentId::new(),
            family_id: Some(FamilyId::new()),
            full_name: "Ana Rojas".into(),
            document_id: Some("V-12345678".into()),
            role: Role::Resident,
            kind: ResidentKind::Member,
            is_active: true,
            can_open_gate: false,
            can_open_door: true,
            can_issue_pedestrian_qr: true,
            can_issue_vehicular_qr: false,
            can_reserve_amenities: false,
        }
    }
}

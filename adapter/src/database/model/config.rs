use kernel::model::config::ConfigEntry;

#[derive(sqlx::FromRow)]
pub struct ConfigRow {
    pub key: String,
    pub value: i64,
    pub description: String,
}

impl From<ConfigRow> for ConfigEntry {
    fn from(value: ConfigRow) -> Self {
        let ConfigRow {
            key,
            value,
            description,
        } = value;
        ConfigEntry::new(key, value, description)
    }
}

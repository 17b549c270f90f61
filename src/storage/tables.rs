use redb::TableDefinition;

/// Secrets: secret name -> SecretRecord (msgpack)
pub const SECRETS: TableDefinition<&str, &[u8]> = TableDefinition::new("secrets");

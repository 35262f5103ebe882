/// Generates a fresh surrogate identity for App, Version and Device rows.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub type CredentialId = String;

/// Form data for one set of site credentials. Lives only as long as the wizard run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CredentialEntry {
    pub id: CredentialId,
    pub label: String,
    pub username: String,
    pub password: String,
    pub api_key: String,
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialField {
    Label,
    Username,
    Password,
    ApiKey,
    Notes,
}

impl CredentialEntry {
    pub(crate) fn new(id: CredentialId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub(crate) fn set(&mut self, field: CredentialField, value: String) {
        let slot = match field {
            CredentialField::Label => &mut self.label,
            CredentialField::Username => &mut self.username,
            CredentialField::Password => &mut self.password,
            CredentialField::ApiKey => &mut self.api_key,
            CredentialField::Notes => &mut self.notes,
        };
        *slot = value;
    }

    pub fn get(&self, field: CredentialField) -> &str {
        match field {
            CredentialField::Label => &self.label,
            CredentialField::Username => &self.username,
            CredentialField::Password => &self.password,
            CredentialField::ApiKey => &self.api_key,
            CredentialField::Notes => &self.notes,
        }
    }

    /// True when every field besides the id is blank.
    pub fn is_blank(&self) -> bool {
        [
            &self.label,
            &self.username,
            &self.password,
            &self.api_key,
            &self.notes,
        ]
        .iter()
        .all(|value| value.trim().is_empty())
    }
}

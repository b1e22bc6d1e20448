use serde::Deserialize;
use validator::{Validate, ValidationErrors};

pub const DESCRIPTION_MAX_CHARS: u64 = 100;

/// The three free-text fields of the upload form.
///
/// Every button on the page submits the same HTML form, so capture actions carry these too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
pub struct FormValues {
    #[serde(default)]
    #[validate(length(min = 1, message = "Name your tree."))]
    pub name: String,
    #[serde(default, rename = "type")]
    #[validate(length(min = 1, message = "Tell us what kind of tree it is."))]
    pub tree_type: String,
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 100,
        message = "Description must be between 1 and 100 characters."
    ))]
    pub description: String,
}

/// First validation message per field, ready to render next to the input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub name: Option<String>,
    pub tree_type: Option<String>,
    pub description: Option<String>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.tree_type.is_none() && self.description.is_none()
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = Self::default();
        for (field, problems) in errors.field_errors() {
            let message = problems
                .first()
                .and_then(|problem| problem.message.as_ref())
                .map(|message| message.to_string())
                .unwrap_or_else(|| "Invalid value.".to_owned());
            match &*field {
                "name" => fields.name = Some(message),
                "type" | "tree_type" => fields.tree_type = Some(message),
                "description" => fields.description = Some(message),
                _ => {}
            }
        }
        fields
    }
}

impl FormValues {
    pub fn check(&self) -> Result<(), FieldErrors> {
        self.validate().map_err(FieldErrors::from)
    }
}

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Everything one install run needs; fixed for the lifetime of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRequest {
    pub id: String,
    pub name: String,
    pub url: String,
    pub icon: String,
    pub install_root: PathBuf,
    pub home: PathBuf,
    pub runtime_version: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("{field} '{value}' must be a single path component")]
    NotAComponent { field: &'static str, value: String },
    #[error("{field} {value:?} must not contain control characters")]
    ControlCharacter { field: &'static str, value: String },
}

impl InstallRequest {
    /// Checks the fields that end up as file or directory names.
    ///
    /// The identifier names the icon-store entry and launcher file, the runtime version names
    /// the shared directory; either escaping its parent would let one install write over
    /// another's state.
    pub fn validate(&self) -> Result<(), RequestError> {
        require_component("id", &self.id)?;
        require_component("runtime_version", &self.runtime_version)?;
        if self.name.trim().is_empty() {
            return Err(RequestError::Empty { field: "name" });
        }
        // The name is written verbatim into single-line launcher fields.
        if self.name.chars().any(char::is_control) {
            return Err(RequestError::ControlCharacter {
                field: "name",
                value: self.name.clone(),
            });
        }
        if self.icon.trim().is_empty() {
            return Err(RequestError::Empty { field: "icon" });
        }
        Ok(())
    }
}

fn require_component(field: &'static str, value: &str) -> Result<(), RequestError> {
    if value.trim().is_empty() {
        return Err(RequestError::Empty { field });
    }
    let mut components = Path::new(value).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single_normal || value.contains(['/', '\\']) {
        return Err(RequestError::NotAComponent {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

use serde::{Deserialize, Serialize};

/// Access level checked by the convenience predicates.
///
/// Levels are independent: granting `manage` says nothing about `edit` or
/// `view` unless the policy text grants those too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Edit,
    Manage,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Edit => "edit",
            Action::Manage => "manage",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Action {
    type Err = crate::AuthzError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "view" => Ok(Action::View),
            "edit" => Ok(Action::Edit),
            "manage" => Ok(Action::Manage),
            _ => Err(crate::AuthzError::InvalidAction(value.to_string())),
        }
    }
}

// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use chrono::{DateTime, Utc};
use inflector::Inflector as _;
use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tabled::Tabled;

use crate::http::Call;

use super::{string_or_number, Executor};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum UserType {
    Maintainer,
    Developer,
    #[default]
    #[serde(other)]
    User,
}

impl UserType {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Maintainer => "maintainer",
            Self::Developer => "developer",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str().to_title_case())
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Tabled)]
pub(crate) struct User {
    #[tabled(rename = "ID")]
    #[serde(deserialize_with = "string_or_number")]
    pub(crate) id_no: String,
    #[tabled(rename = "Name", display_with = "display_optional")]
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[tabled(rename = "Email", display_with = "display_optional")]
    #[serde(default)]
    pub(crate) email: Option<String>,
    #[tabled(rename = "Branch", display_with = "display_optional")]
    #[serde(default)]
    pub(crate) branch: Option<String>,
    #[tabled(rename = "Year", display_with = "display_optional")]
    #[serde(default)]
    pub(crate) year: Option<u32>,
    #[tabled(rename = "Type")]
    #[serde(default)]
    pub(crate) user_type: UserType,
    #[tabled(skip)]
    #[serde(default)]
    pub(crate) created_at: Option<DateTime<Utc>>,
    #[tabled(skip)]
    #[serde(default)]
    pub(crate) updated_at: Option<DateTime<Utc>>,
}

impl User {
    /// A user known only by what an access token says about it.
    pub(crate) fn from_claims(id_no: String, user_type: UserType) -> Self {
        Self {
            id_no,
            name: None,
            email: None,
            branch: None,
            year: None,
            user_type,
            created_at: None,
            updated_at: None,
        }
    }

    pub(crate) fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id_no)
    }
}

pub(crate) fn display_optional<T: fmt::Display>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

pub(crate) struct GetMe;

impl From<GetMe> for Call {
    fn from(_: GetMe) -> Self {
        Self::get("/users/me/")
    }
}

impl Executor for GetMe {
    type Response = User;
}

pub(crate) struct PasswordChange {
    pub(crate) current: SecretString,
    pub(crate) new: SecretString,
    pub(crate) confirm: SecretString,
}

/// Partial profile update; absent fields are left alone by the server.
#[derive(Default)]
pub(crate) struct UpdateMe {
    pub(crate) name: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) password: Option<PasswordChange>,
}

impl From<UpdateMe> for Call {
    fn from(value: UpdateMe) -> Self {
        let mut body = Map::new();
        if let Some(name) = value.name {
            _ = body.insert("name".to_owned(), name.into());
        }
        if let Some(email) = value.email {
            _ = body.insert("email".to_owned(), email.into());
        }
        if let Some(password) = value.password {
            _ = body.insert(
                "current_password".to_owned(),
                password.current.expose_secret().as_str().into(),
            );
            _ = body.insert(
                "new_password".to_owned(),
                password.new.expose_secret().as_str().into(),
            );
            _ = body.insert(
                "new_password_confirm".to_owned(),
                password.confirm.expose_secret().as_str().into(),
            );
        }
        Self::put("/users/update_me/", Value::Object(body))
    }
}

impl Executor for UpdateMe {
    type Response = User;
}

/// Edits someone else's profile. Only maintainers and developers may.
pub(crate) struct UpdateUser {
    pub(crate) id_no: String,
    pub(crate) name: Option<String>,
    pub(crate) email: Option<String>,
}

impl From<UpdateUser> for Call {
    fn from(value: UpdateUser) -> Self {
        let mut body = Map::new();
        if let Some(name) = value.name {
            _ = body.insert("name".to_owned(), name.into());
        }
        if let Some(email) = value.email {
            _ = body.insert("email".to_owned(), email.into());
        }
        Self::patch(format!("/users/{}/", value.id_no), Value::Object(body))
    }
}

impl Executor for UpdateUser {
    type Response = User;
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use serde_test::{assert_tokens, Token};

    use super::*;

    #[test]
    fn user_type_wire_names() {
        assert_tokens(
            &UserType::Maintainer,
            &[Token::UnitVariant {
                name: "UserType",
                variant: "maintainer",
            }],
        );
        assert_tokens(
            &UserType::Developer,
            &[Token::UnitVariant {
                name: "UserType",
                variant: "developer",
            }],
        );
        assert_tokens(
            &UserType::User,
            &[Token::UnitVariant {
                name: "UserType",
                variant: "user",
            }],
        );
    }

    #[test]
    fn unknown_user_types_are_ordinary_users() {
        let user_type: UserType = serde_json::from_value(json!("student")).unwrap();
        assert_eq!(user_type, UserType::User);
        assert_eq!(UserType::Maintainer.to_string(), "Maintainer");
    }

    #[test]
    fn decodes_profile_payload() {
        let user: User = serde_json::from_value(json!({
            "id_no": "2023A7PS0466G",
            "name": "Asha Rao",
            "email": "asha@example.edu",
            "branch": null,
            "year": 3,
            "user_type": "maintainer",
            "created_at": "2024-08-01T09:30:00Z",
            "updated_at": "2024-09-12T18:02:11.512Z",
        }))
        .unwrap();

        assert_eq!(user.id_no, "2023A7PS0466G");
        assert_eq!(user.display_name(), "Asha Rao");
        assert_eq!(user.year, Some(3));
        assert_eq!(user.branch, None);
        assert_eq!(user.user_type, UserType::Maintainer);
    }

    #[test]
    fn update_only_sends_given_fields() {
        let call: Call = UpdateMe {
            email: Some("new@example.edu".to_owned()),
            ..UpdateMe::default()
        }
        .into();

        assert_eq!(call.path(), "/users/update_me/");
        assert_eq!(call.body(), Some(&json!({"email": "new@example.edu"})));
    }

    #[test]
    fn editing_another_user_patches_their_record() {
        let call: Call = UpdateUser {
            id_no: "2022B4PS0101G".to_owned(),
            name: Some("Ravi Menon".to_owned()),
            email: None,
        }
        .into();

        assert_eq!(call.method(), &reqwest::Method::PATCH);
        assert_eq!(call.path(), "/users/2022B4PS0101G/");
        assert_eq!(call.body(), Some(&json!({"name": "Ravi Menon"})));
    }
}

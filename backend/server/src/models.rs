use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub const PROFILES_TABLE: &str = "profiles";

/// A row of the `profiles` table.
///
/// Columns not named here are kept in `extra` and handed back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub character: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub xp: i64,

    #[serde(default = "first_level", deserialize_with = "null_as_first_level")]
    pub level: i64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub streak: i64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Row inserted right after a successful signup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProfile {
    pub id: String,
    pub email: String,
    pub username: Option<String>,
    pub character: Option<String>,
    pub xp: i64,
    pub level: i64,
    pub streak: i64,
}

impl NewProfile {
    pub fn fresh(
        id: String,
        email: String,
        username: Option<String>,
        character: Option<String>,
    ) -> Self {
        Self {
            id,
            email,
            username,
            character,
            xp: 0,
            level: first_level(),
            streak: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub xp: i64,

    #[serde(default = "first_level", deserialize_with = "null_as_first_level")]
    pub level: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
}

#[derive(Serialize)]
pub(crate) struct ProgressUpdate {
    pub xp: i64,
    pub level: i64,
}

#[derive(Serialize)]
pub(crate) struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct AuthUser {
    pub id: String,
}

/// Signup returns a session wrapping the user, or the bare user when email
/// confirmation is turned on.
#[derive(Deserialize)]
pub(crate) struct SignUpResponse {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub user: Option<AuthUser>,
}

impl SignUpResponse {
    pub fn user_id(self) -> Option<String> {
        self.user.map(|user| user.id).or(self.id)
    }
}

#[derive(Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default)]
    pub expires_in: Option<u64>,

    pub user: AuthUser,
}

fn first_level() -> i64 {
    1
}

// Nullable columns come back as `null`, not as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_first_level<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or_else(first_level))
}

//! Route actions and their validation
//!
//! Raw form submissions arrive as string pairs. They are shaped into a
//! typed [`RouteAction`] here, before anything reaches the store.

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use optimist_core::OptimistError;

use crate::data::{Dog, RouteData};

#[derive(Error, Debug)]
pub enum ActionError {
    #[error("malformed action: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl From<ActionError> for OptimistError {
    fn from(e: ActionError) -> Self {
        OptimistError::InvalidAction(e.to_string())
    }
}

/// Edits the page can make, discriminated on `type`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RouteAction {
    UpdatePerson {
        name: String,
    },
    #[serde(rename_all = "camelCase")]
    UpdateDog {
        id: String,
        name: String,
        #[serde(deserialize_with = "string_or_number")]
        age: u32,
        #[serde(deserialize_with = "string_or_number")]
        love_percent: u32,
    },
}

impl RouteAction {
    /// Parse raw form fields
    pub fn from_form<K, V>(fields: &[(K, V)]) -> Result<Self, ActionError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let map: serde_json::Map<String, serde_json::Value> = fields
            .iter()
            .map(|(k, v)| (k.as_ref().to_string(), serde_json::Value::from(v.as_ref())))
            .collect();
        Self::from_json(serde_json::Value::Object(map))
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, ActionError> {
        Ok(serde_json::from_value(value)?)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber<T> {
    Number(T),
    Text(String),
}

fn string_or_number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    match StringOrNumber::<T>::deserialize(deserializer)? {
        StringOrNumber::Number(n) => Ok(n),
        StringOrNumber::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Update function: applies one action to a draft of the page data.
/// Edits to dogs that are not on the page are ignored.
pub fn apply_route_action(draft: &mut RouteData, action: &RouteAction) {
    match action {
        RouteAction::UpdatePerson { name } => draft.name = name.clone(),
        RouteAction::UpdateDog {
            id,
            name,
            age,
            love_percent,
        } => {
            if let Some(dog) = draft.favourite_dogs.iter_mut().find(|d| d.id == *id) {
                *dog = Dog {
                    id: id.clone(),
                    name: name.clone(),
                    age: *age,
                    love_percent: *love_percent,
                };
            }
        }
    }
}

pub type ApplyRouteFn = fn(&mut RouteData, &RouteAction);

//! Page data and the in-memory registry that owns the truth

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use optimist_core::{OptimistError, OptimistResult};
use optimist_runtime::{AuthoritativeSource, Transport};

use crate::actions::RouteAction;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dog {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub love_percent: u32,
}

/// What the page renders
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteData {
    pub name: String,
    pub favourite_dogs: Vec<Dog>,
}

impl RouteData {
    pub fn sample() -> Self {
        DogRegistry::sample(Duration::ZERO).snapshot()
    }

    pub fn dog(&self, id: &str) -> Option<&Dog> {
        self.favourite_dogs.iter().find(|d| d.id == id)
    }

    /// Mean love across favourite dogs, 0 with no dogs
    pub fn average_love(&self) -> f64 {
        if self.favourite_dogs.is_empty() {
            return 0.0;
        }
        let total: u32 = self.favourite_dogs.iter().map(|d| d.love_percent).sum();
        f64::from(total) / self.favourite_dogs.len() as f64
    }
}

/// HTTP-style method a form submits with
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormMethod {
    #[default]
    Post,
    Get,
}

/// Transport options attached to each submission
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubmitOptions {
    pub method: FormMethod,
}

#[derive(Clone, Debug)]
struct DogRecord {
    name: String,
    age: u32,
    love_percent: u32,
}

#[derive(Debug)]
struct Registry {
    person_name: String,
    favourite_dogs: Vec<String>,
    dogs: HashMap<String, DogRecord>,
}

/// Source of truth for the page, with artificial request latency
#[derive(Debug)]
pub struct DogRegistry {
    inner: Mutex<Registry>,
    latency: Duration,
}

impl DogRegistry {
    pub fn sample(latency: Duration) -> Self {
        let dogs = HashMap::from([
            (
                "abc-123".to_string(),
                DogRecord {
                    name: "Willow".to_string(),
                    age: 3,
                    love_percent: 100,
                },
            ),
            (
                "def-456".to_string(),
                DogRecord {
                    name: "Noodle".to_string(),
                    age: 4,
                    love_percent: 95,
                },
            ),
        ]);

        DogRegistry {
            inner: Mutex::new(Registry {
                person_name: "Drew".to_string(),
                favourite_dogs: vec!["abc-123".to_string(), "def-456".to_string()],
                dogs,
            }),
            latency,
        }
    }

    /// Current page data, in favourite order
    pub fn snapshot(&self) -> RouteData {
        let registry = self.inner.lock();
        RouteData {
            name: registry.person_name.clone(),
            favourite_dogs: registry
                .favourite_dogs
                .iter()
                .filter_map(|id| {
                    registry.dogs.get(id).map(|d| Dog {
                        id: id.clone(),
                        name: d.name.clone(),
                        age: d.age,
                        love_percent: d.love_percent,
                    })
                })
                .collect(),
        }
    }

    /// Apply an action to the stored data
    pub fn apply(&self, action: &RouteAction) -> OptimistResult<()> {
        let mut registry = self.inner.lock();
        match action {
            RouteAction::UpdatePerson { name } => {
                registry.person_name = name.clone();
            }
            RouteAction::UpdateDog {
                id,
                name,
                age,
                love_percent,
            } => {
                let dog = registry
                    .dogs
                    .get_mut(id)
                    .ok_or_else(|| OptimistError::Transport(format!("unknown dog {id}")))?;
                dog.name = name.clone();
                dog.age = *age;
                dog.love_percent = *love_percent;
            }
        }
        Ok(())
    }
}

impl Transport<RouteAction, SubmitOptions> for DogRegistry {
    async fn perform(&self, action: RouteAction, options: SubmitOptions) -> OptimistResult<()> {
        tokio::time::sleep(self.latency).await;
        if options.method != FormMethod::Post {
            return Err(OptimistError::Transport(format!(
                "method {:?} not allowed",
                options.method
            )));
        }
        self.apply(&action)?;
        info!(?action, "registry updated");
        Ok(())
    }
}

impl AuthoritativeSource<RouteData> for DogRegistry {
    async fn fetch(&self) -> OptimistResult<RouteData> {
        Ok(self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_snapshot() {
        let data = RouteData::sample();
        assert_eq!(data.name, "Drew");
        assert_eq!(data.favourite_dogs.len(), 2);
        assert_eq!(data.dog("abc-123").map(|d| d.age), Some(3));
        assert_eq!(data.average_love(), 97.5);
    }

    #[test]
    fn test_average_love_empty() {
        let data = RouteData {
            name: "Nobody".to_string(),
            favourite_dogs: Vec::new(),
        };
        assert_eq!(data.average_love(), 0.0);
    }

    #[test]
    fn test_registry_apply() {
        let registry = DogRegistry::sample(Duration::ZERO);
        registry
            .apply(&RouteAction::UpdateDog {
                id: "def-456".to_string(),
                name: "Noodle".to_string(),
                age: 5,
                love_percent: 99,
            })
            .unwrap();

        assert_eq!(registry.snapshot().dog("def-456").map(|d| d.age), Some(5));
        assert!(registry
            .apply(&RouteAction::UpdateDog {
                id: "nope".to_string(),
                name: "x".to_string(),
                age: 1,
                love_percent: 1,
            })
            .is_err());
    }

    #[tokio::test]
    async fn test_registry_rejects_get() {
        let registry = DogRegistry::sample(Duration::ZERO);
        let result = registry
            .perform(
                RouteAction::UpdatePerson {
                    name: "Sam".to_string(),
                },
                SubmitOptions {
                    method: FormMethod::Get,
                },
            )
            .await;

        assert!(result.is_err());
        assert_eq!(registry.snapshot().name, "Drew");
    }
}

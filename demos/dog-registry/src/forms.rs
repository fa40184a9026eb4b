//! Edit widgets. Each mints one handle when created and submits every
//! edit through it, so rapid edits from one widget coalesce.

use std::sync::Arc;

use optimist_core::HandleId;
use optimist_runtime::Submitter;
use optimist_state::SubmitOutcome;

use crate::actions::{ActionError, ApplyRouteFn, RouteAction};
use crate::data::{DogRegistry, RouteData, SubmitOptions};

pub type PageSubmitter = Submitter<RouteData, RouteAction, SubmitOptions, ApplyRouteFn, Arc<DogRegistry>>;

/// Edits the person's name
pub struct PersonForm {
    handle: HandleId,
    submitter: PageSubmitter,
}

impl PersonForm {
    pub fn new(submitter: PageSubmitter) -> Self {
        PersonForm {
            handle: HandleId::mint(),
            submitter,
        }
    }

    pub fn handle(&self) -> HandleId {
        self.handle
    }

    pub fn rename(&self, name: &str) -> Result<SubmitOutcome, ActionError> {
        let action = RouteAction::from_form(&[("type", "updatePerson"), ("name", name)])?;
        Ok(self
            .submitter
            .submit(self.handle, action, SubmitOptions::default()))
    }
}

/// Edits one dog's fields
pub struct DogForm {
    handle: HandleId,
    dog_id: String,
    submitter: PageSubmitter,
}

impl DogForm {
    pub fn new(dog_id: impl Into<String>, submitter: PageSubmitter) -> Self {
        DogForm {
            handle: HandleId::mint(),
            dog_id: dog_id.into(),
            submitter,
        }
    }

    pub fn handle(&self) -> HandleId {
        self.handle
    }

    pub fn dog_id(&self) -> &str {
        &self.dog_id
    }

    /// Submit the form's current field values, as typed
    pub fn edit(&self, name: &str, age: &str, love_percent: &str) -> Result<SubmitOutcome, ActionError> {
        let action = RouteAction::from_form(&[
            ("type", "updateDog"),
            ("id", self.dog_id.as_str()),
            ("name", name),
            ("age", age),
            ("lovePercent", love_percent),
        ])?;
        Ok(self
            .submitter
            .submit(self.handle, action, SubmitOptions::default()))
    }

    /// Whether this widget has a request outstanding
    pub fn is_saving(&self) -> bool {
        self.submitter.is_busy(self.handle)
    }
}

/// Text rendering of the page
pub fn render(data: &RouteData, saving: bool) -> String {
    let mut out = format!("Person: {}\n", data.name);
    for dog in &data.favourite_dogs {
        out.push_str(&format!(
            "  {} ({}) age {} love {}%\n",
            dog.name, dog.id, dog.age, dog.love_percent
        ));
    }
    out.push_str(&format!("Average love: {:.1}%\n", data.average_love()));
    if saving {
        out.push_str("Something is saving\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use optimist_runtime::{RuntimeConfig, Session};

    use crate::actions::apply_route_action;

    #[tokio::test]
    async fn test_dog_form_edits_coalesce() {
        let registry = Arc::new(DogRegistry::sample(Duration::from_millis(20)));
        let mut session = Session::start(
            RuntimeConfig::default(),
            apply_route_action as ApplyRouteFn,
            Arc::clone(&registry),
            Arc::clone(&registry),
        )
        .await
        .unwrap();

        let willow = DogForm::new("abc-123", session.submitter());
        assert_eq!(willow.edit("Willow", "4", "100").unwrap(), SubmitOutcome::Dispatched);
        assert_eq!(
            willow.edit("Willow", "5", "100").unwrap(),
            SubmitOutcome::Queued { replaced: false }
        );
        assert!(willow.is_saving());

        let view = session.view().unwrap();
        assert_eq!(view.dog("abc-123").map(|d| d.age), Some(5));
        assert_eq!(registry.snapshot().dog("abc-123").map(|d| d.age), Some(3));

        session.run_until_idle().await.unwrap();
        assert!(!willow.is_saving());
        assert_eq!(registry.snapshot().dog("abc-123").map(|d| d.age), Some(5));
        assert_eq!(session.view().unwrap(), registry.snapshot());
    }

    #[tokio::test]
    async fn test_invalid_edit_never_reaches_store() {
        let registry = Arc::new(DogRegistry::sample(Duration::ZERO));
        let session = Session::start(
            RuntimeConfig::default(),
            apply_route_action as ApplyRouteFn,
            Arc::clone(&registry),
            Arc::clone(&registry),
        )
        .await
        .unwrap();

        let form = DogForm::new("def-456", session.submitter());
        assert!(form.edit("Noodle", "four", "95").is_err());
        assert!(!session.is_saving());
        assert_eq!(session.stats().submissions, 0);
    }

    #[test]
    fn test_render_shows_saving() {
        let text = render(&RouteData::sample(), true);
        assert!(text.contains("Person: Drew"));
        assert!(text.contains("Average love: 97.5%"));
        assert!(text.contains("Something is saving"));
    }
}

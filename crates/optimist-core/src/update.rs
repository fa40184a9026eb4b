//! Update records and the update-function contract

/// One speculative mutation: a domain action plus its transport options.
///
/// Updates are stored whole and replaced whole; the engine never merges
/// two updates field by field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Update<A, O> {
    action: A,
    options: O,
}

impl<A, O> Update<A, O> {
    pub fn new(action: A, options: O) -> Self {
        Update { action, options }
    }

    #[inline]
    pub fn action(&self) -> &A {
        &self.action
    }

    #[inline]
    pub fn options(&self) -> &O {
        &self.options
    }

    pub fn into_parts(self) -> (A, O) {
        (self.action, self.options)
    }
}

/// Applies one domain action to a draft of the state.
///
/// Implementations must be deterministic and touch nothing but the draft:
/// the store replays every active update on every recompute. To replace
/// the draft wholesale, assign through the reference.
pub trait UpdateFn<S, A> {
    fn apply(&self, draft: &mut S, action: &A);
}

impl<S, A, F> UpdateFn<S, A> for F
where
    F: Fn(&mut S, &A),
{
    #[inline]
    fn apply(&self, draft: &mut S, action: &A) {
        self(draft, action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doubler;

    impl UpdateFn<Vec<i32>, i32> for Doubler {
        fn apply(&self, draft: &mut Vec<i32>, action: &i32) {
            draft.push(action * 2);
        }
    }

    #[test]
    fn test_update_accessors() {
        let update = Update::new("rename", 7u8);
        assert_eq!(*update.action(), "rename");
        assert_eq!(*update.options(), 7);
        assert_eq!(update.into_parts(), ("rename", 7));
    }

    #[test]
    fn test_closure_update_fn() {
        let f = |draft: &mut String, action: &&str| draft.push_str(action);
        let mut s = String::from("a");
        f.apply(&mut s, &"b");
        assert_eq!(s, "ab");
    }

    #[test]
    fn test_replacement_through_draft() {
        let f = |draft: &mut Vec<i32>, action: &Vec<i32>| *draft = action.clone();
        let mut state = vec![1, 2, 3];
        f.apply(&mut state, &vec![9]);
        assert_eq!(state, vec![9]);
    }

    #[test]
    fn test_struct_update_fn() {
        let mut state = Vec::new();
        Doubler.apply(&mut state, &4);
        assert_eq!(state, vec![8]);
    }
}

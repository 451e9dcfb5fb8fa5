//! Fetch lifecycle of a view: exactly one of loading, failed or ready.

/// What a data-backed view shows. The most recently applied result wins.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderState<T> {
    Loading,
    Failed(String),
    Ready(T),
}

impl<T> Default for RenderState<T> {
    fn default() -> Self {
        Self::Loading
    }
}

impl<T> RenderState<T> {
    pub fn from_result<E: std::fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Ready(value),
            Err(e) => Self::Failed(e.to_string()),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> RenderState<U> {
        match self {
            Self::Loading => RenderState::Loading,
            Self::Failed(message) => RenderState::Failed(message),
            Self::Ready(value) => RenderState::Ready(f(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_are_exclusive() {
        let loading: RenderState<u8> = RenderState::default();
        assert!(loading.is_loading());
        assert_eq!(loading.ready(), None);
        assert_eq!(loading.error(), None);

        let failed = RenderState::<u8>::from_result(Err("Failed to fetch data"));
        assert!(!failed.is_loading());
        assert_eq!(failed.error(), Some("Failed to fetch data"));
        assert_eq!(failed.ready(), None);

        let ready = RenderState::<u8>::from_result::<String>(Ok(3)).map(|n| n * 2);
        assert_eq!(ready.ready(), Some(&6));
        assert_eq!(ready.error(), None);
    }
}

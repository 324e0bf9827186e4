/// Status of the one outstanding request a screen cares about.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RequestState<T> {
    #[default]
    Idle,
    Loading,
    Success(T),
    Error(String),
}

impl<T> RequestState<T> {
    pub fn start(&mut self) {
        *self = RequestState::Loading;
    }

    pub fn succeed(&mut self, value: T) {
        *self = RequestState::Success(value);
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        *self = RequestState::Error(message.into());
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, RequestState::Loading)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            RequestState::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RequestState::Error(message) => Some(message),
            _ => None,
        }
    }
}

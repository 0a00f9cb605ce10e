use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum RouteError {
    // "METHOD[|METHOD] /path" or "/path"
    Definition(String),

    Pattern(regex::Error),
}

impl Display for RouteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use RouteError::*;
        match self {
            Definition(d) => write!(f, "Illegal route definition `{}`", d),
            Pattern(e) => write!(f, "Illegal route pattern: {}", e),
        }
    }
}

impl From<regex::Error> for RouteError {
    fn from(e: regex::Error) -> Self { RouteError::Pattern(e) }
}

impl std::error::Error for RouteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let RouteError::Pattern(e) = self {
            Some(e)
        } else {
            None
        }
    }
}

use didery_common::ValidationError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 100;

/// Raw `?offset=&limit=` query values.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub offset: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageQuery {
    pub fn resolve(&self) -> Result<PageRequest, ValidationError> {
        let offset = match self.offset.as_deref() {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .map_err(|_| ValidationError::MalformedField("offset must be an integer.".into()))?,
            None => 0,
        };
        let limit = match self.limit.as_deref() {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .map_err(|_| ValidationError::MalformedField("limit must be an integer.".into()))?,
            None => DEFAULT_LIMIT,
        };
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(ValidationError::MalformedField(format!(
                "Limit must be a value between 1 and {MAX_LIMIT}."
            )));
        }
        Ok(PageRequest { offset, limit })
    }
}

/// One page of stored values plus the total number stored.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(skip)]
    pub total: usize,
}

use serde::Deserialize;
use tradechat_core::AppError;

pub const MAX_PER_PAGE: u32 = 30;

/// Pagination query parameters, bounded at the HTTP boundary:
/// `page >= 1`, `1 <= per_page <= 30`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    10
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PageQuery {
    pub fn validate(self) -> Result<Self, AppError> {
        if self.page < 1 {
            return Err(AppError::bad_request("page must be >= 1"));
        }
        if self.per_page < 1 || self.per_page > MAX_PER_PAGE {
            return Err(AppError::bad_request(format!(
                "per_page must be between 1 and {MAX_PER_PAGE}"
            )));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_when_params_absent() {
        let query: PageQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, 10);
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_bounds_are_enforced() {
        let query = PageQuery { page: 0, per_page: 10 };
        assert!(query.validate().is_err());

        let query = PageQuery { page: 1, per_page: 0 };
        assert!(query.validate().is_err());

        let query = PageQuery { page: 1, per_page: 31 };
        assert!(query.validate().is_err());

        let query = PageQuery { page: 1, per_page: 30 };
        assert!(query.validate().is_ok());
    }
}

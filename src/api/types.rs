use serde::Serialize;

use crate::db::repositories::Page;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub const fn default_page() -> u64 {
    1
}

pub const fn default_limit() -> u64 {
    20
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct PaginationDto {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Debug, Serialize)]
pub struct PaginatedDto<T> {
    pub items: Vec<T>,
    pub pagination: PaginationDto,
}

impl<T> From<Page<T>> for PaginatedDto<T> {
    fn from(page: Page<T>) -> Self {
        let total_pages = page.total_pages();
        Self {
            pagination: PaginationDto {
                current_page: page.page,
                total_pages,
                total_items: page.total,
                has_next: page.page < total_pages,
                has_prev: page.page > 1,
            },
            items: page.items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_metadata() {
        let page = Page {
            items: vec![1, 2],
            total: 45,
            page: 2,
            limit: 20,
        };

        let dto = PaginatedDto::from(page);
        assert_eq!(
            dto.pagination,
            PaginationDto {
                current_page: 2,
                total_pages: 3,
                total_items: 45,
                has_next: true,
                has_prev: true,
            }
        );
    }

    #[test]
    fn test_empty_page() {
        let page: Page<i32> = Page {
            items: vec![],
            total: 0,
            page: 1,
            limit: 20,
        };

        let dto = PaginatedDto::from(page);
        assert_eq!(dto.pagination.total_pages, 0);
        assert!(!dto.pagination.has_next);
        assert!(!dto.pagination.has_prev);
    }
}

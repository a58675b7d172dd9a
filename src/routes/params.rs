use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

// Pagination fields stay inline rather than in a flattened sub-struct:
// serde's flatten buffers query values as strings, which rejects numeric
// input for the Option<i64> fields.
#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<String>,
    pub sort_order: Option<SortOrder>,
}

impl OrderListQuery {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::Uri;

    #[test]
    fn numeric_query_values_deserialize() {
        let uri: Uri = "/api/admin/orders?page=2&per_page=10&status=paid&sort_order=asc"
            .parse()
            .expect("valid uri");
        let Query(query) = Query::<OrderListQuery>::try_from_uri(&uri).expect("query parses");

        assert_eq!(query.normalize(), (2, 10, 10));
        assert_eq!(query.status.as_deref(), Some("paid"));
        assert!(matches!(query.sort_order, Some(SortOrder::Asc)));
    }

    #[test]
    fn normalize_defaults_and_clamps() {
        let uri: Uri = "/api/admin/orders".parse().expect("valid uri");
        let Query(query) = Query::<OrderListQuery>::try_from_uri(&uri).expect("query parses");
        assert_eq!(query.normalize(), (1, 20, 0));

        let uri: Uri = "/api/admin/orders?page=0&per_page=500"
            .parse()
            .expect("valid uri");
        let Query(query) = Query::<OrderListQuery>::try_from_uri(&uri).expect("query parses");
        assert_eq!(query.normalize(), (1, 100, 0));
    }
}

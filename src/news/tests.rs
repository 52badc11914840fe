//! Tests for search response normalization

#[cfg(test)]
mod tests {
    use super::super::*;
    use serde_json::json;

    fn two_articles() -> Value {
        json!([
            { "url": "https://a.example/1", "source": "Reuters" },
            { "link": "https://b.example/2", "publisher": "CNBC" }
        ])
    }

    #[test]
    fn test_bare_list() {
        let response = SearchResponse::from_value(two_articles());
        assert_eq!(response.shape(), "list");
        let articles = response.into_articles();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].id, "https://a.example/1");
        assert_eq!(articles[1].source, "CNBC");
    }

    #[test]
    fn test_wrapped_shapes() {
        for key in ["articles", "data", "results"] {
            let mut body = serde_json::Map::new();
            body.insert(key.to_string(), two_articles());
            body.insert("page".to_string(), json!(1));
            let response = SearchResponse::from_value(Value::Object(body));
            assert_eq!(response.shape(), key);
            assert_eq!(response.into_articles().len(), 2);
        }
    }

    #[test]
    fn test_articles_key_takes_precedence() {
        let body = json!({
            "articles": [],
            "data": [{ "url": "https://ignored.example" }]
        });
        let response = SearchResponse::from_value(body);
        assert_eq!(response, SearchResponse::Articles(vec![]));
        assert!(response.into_articles().is_empty());
    }

    #[test]
    fn test_non_array_key_falls_through() {
        let body = json!({
            "articles": null,
            "results": [{ "url": "https://r.example" }]
        });
        let response = SearchResponse::from_value(body);
        assert_eq!(response.shape(), "results");
        assert_eq!(response.into_articles()[0].id, "https://r.example");
    }

    #[test]
    fn test_unrecognized_shapes_are_empty() {
        for body in [
            json!({ "status": "ok", "count": 0 }),
            json!("nothing here"),
            json!(42),
            Value::Null,
        ] {
            let response = SearchResponse::from_value(body);
            assert_eq!(response, SearchResponse::Unrecognized);
            assert!(response.into_articles().is_empty());
        }
    }

    #[test]
    fn test_unreadable_records_are_skipped() {
        let body = json!([
            "just a string",
            { "title": "no link" },
            { "url": "https://ok.example", "title": "kept" }
        ]);
        let articles = normalize_response(body);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].display_title(), "kept");
    }

    #[test]
    fn test_order_is_preserved() {
        let body = json!({ "data": [
            { "url": "https://x.example/3" },
            { "url": "https://x.example/1" },
            { "url": "https://x.example/2" }
        ]});
        let ids: Vec<String> = normalize_response(body).into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["https://x.example/3", "https://x.example/1", "https://x.example/2"]);
    }
}

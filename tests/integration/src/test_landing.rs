//! Landing page and method handling integration tests.

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use crate::{client, url};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_serve_landing_page() {
        let resp = client().get(url("/")).send().await.expect("get /");

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok()),
            Some("text/html; charset=UTF-8")
        );
        assert_eq!(
            resp.headers().get("server").and_then(|v| v.to_str().ok()),
            Some("imgbucket")
        );
        assert!(resp.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_put_and_delete() {
        let client = client();
        for resp in [
            client.put(url("/a.png")).body("x").send().await.expect("put"),
            client.delete(url("/a.png")).send().await.expect("delete"),
        ] {
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            assert_eq!(resp.text().await.expect("body"), "Unsupported method");
        }
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_requests_without_forwarded_https() {
        let resp = reqwest::get(url("/")).await.expect("plain get");
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

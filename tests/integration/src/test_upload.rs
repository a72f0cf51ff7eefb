//! Upload authentication integration tests.

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use crate::{client, credentials, endpoint_url, unique_image, upload_request};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_challenge_anonymous_upload() {
        let resp = upload_request(&client(), &unique_image("anon"))
            .send()
            .await
            .expect("post");

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            resp.headers()
                .get("www-authenticate")
                .and_then(|v| v.to_str().ok()),
            Some("Basic realm=\"Enter username and password.\"")
        );
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_challenge_wrong_password() {
        let (username, _) = credentials();
        let resp = upload_request(&client(), &unique_image("wrong"))
            .basic_auth(username, Some("definitely-not-the-password"))
            .send()
            .await
            .expect("post");

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_return_image_url_for_upload() {
        let (username, password) = credentials();
        let resp = upload_request(&client(), &unique_image("url"))
            .header("host", "img.example")
            .basic_auth(username, Some(password))
            .send()
            .await
            .expect("post");

        assert_eq!(resp.status(), StatusCode::OK, "endpoint {}", endpoint_url());
        assert!(resp.headers().contains_key("etag"));

        let body = resp.text().await.expect("body");
        let key = body
            .strip_prefix("https://img.example/")
            .unwrap_or_else(|| panic!("unexpected url {body}"));
        let stem = key.strip_suffix(".png").expect("png suffix");
        assert_eq!(stem.len(), 16);
        assert!(stem.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

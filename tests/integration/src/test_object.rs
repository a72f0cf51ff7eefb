//! Object retrieval integration tests.

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use crate::{client, unique_image, upload, url};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_get_uploaded_image() {
        let client = client();
        let data = unique_image("get");
        let key = upload(&client, &data).await;

        let resp = client.get(url(&key)).send().await.expect("get");
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok()),
            Some("image/png")
        );
        assert!(resp.headers().contains_key("etag"));
        assert_eq!(resp.bytes().await.expect("body"), data);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_return_404_for_missing_image() {
        let resp = client()
            .get(url("ffffffffffffffff.png"))
            .send()
            .await
            .expect("get");

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = resp.text().await.expect("body");
        assert!(body.contains("ffffffffffffffff.png"));
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_serve_byte_range() {
        let client = client();
        let data = unique_image("range");
        let key = upload(&client, &data).await;

        let resp = client
            .get(url(&key))
            .header("range", "bytes=0-3")
            .send()
            .await
            .expect("ranged get");

        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        let expected = format!("bytes 0-3/{}", data.len());
        assert_eq!(
            resp.headers()
                .get("content-range")
                .and_then(|v| v.to_str().ok()),
            Some(expected.as_str())
        );
        assert_eq!(resp.bytes().await.expect("body"), data.slice(0..4));
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_revalidate_with_etag() {
        let client = client();
        let key = upload(&client, &unique_image("etag")).await;

        let first = client.get(url(&key)).send().await.expect("get");
        let etag = first
            .headers()
            .get("etag")
            .cloned()
            .expect("etag header");

        let resp = client
            .get(url(&key))
            .header("if-none-match", etag)
            .send()
            .await
            .expect("conditional get");
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_head_uploaded_image() {
        let client = client();
        let data = unique_image("head");
        let key = upload(&client, &data).await;

        let resp = client.head(url(&key)).send().await.expect("head");
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key("etag"));
        assert!(resp.bytes().await.expect("body").is_empty());
    }
}

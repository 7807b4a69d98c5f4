#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::routes;
    use crate::tests::support::Fixture;

    async fn setup_test_app() -> (Router, Fixture) {
        let fixture = Fixture::new().await;
        (routes::router(fixture.state.clone()), fixture)
    }

    fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
        (status, value)
    }

    fn multipart(fields: &[(&str, &str)]) -> (String, Body) {
        let boundary = "ausleihe-test-boundary";
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{boundary}--\r\n"));
        (format!("multipart/form-data; boundary={boundary}"), Body::from(body))
    }

    #[tokio::test]
    async fn test_healthz_needs_no_session() {
        let (app, _f) = setup_test_app().await;
        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_missing_or_unknown_token_is_unauthorized() {
        let (app, _f) = setup_test_app().await;

        let (status, body) = send(&app, request(Method::GET, "/api/set-assignments", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");

        let (status, _) = send(&app, request(Method::GET, "/api/sets/authorized", Some("bogus"), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_non_admin_cannot_create_groups() {
        let (app, f) = setup_test_app().await;
        let user = f.user("ausleiher", vec![]).await;
        let token = f.token_for(user.id).await;

        let (status, body) =
            send(&app, request(Method::POST, "/api/set-assignments", Some(&token), Some(json!({"name": "G"})))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_group_names_are_unique() {
        let (app, f) = setup_test_app().await;
        let token = Some(f.admin_token.as_str());

        let (status, body) =
            send(&app, request(Method::POST, "/api/set-assignments", token, Some(json!({"name": "Lehrer Technik"})))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["name"], "Lehrer Technik");

        let (status, body) =
            send(&app, request(Method::POST, "/api/set-assignments", token, Some(json!({"name": "lehrer technik"})))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_empty_collections_are_empty_arrays() {
        let (app, f) = setup_test_app().await;
        let token = Some(f.admin_token.as_str());

        for uri in ["/api/set-assignments", "/api/categories", "/api/sets", "/api/sets/authorized"] {
            let (status, body) = send(&app, request(Method::GET, uri, token, None)).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
            assert_eq!(body, json!([]), "{uri}");
        }
    }

    #[tokio::test]
    async fn test_delete_group_reports_counts() {
        let (app, f) = setup_test_app().await;
        let g = f.group("G1").await;
        f.set(Some(vec![g.id])).await;
        f.user("u", vec![g.id]).await;

        let uri = format!("/api/set-assignments/{}", g.id);
        let (status, body) = send(&app, request(Method::DELETE, &uri, Some(&f.admin_token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["removedFromSets"], 1);
        assert_eq!(body["removedFromUsers"], 1);
        assert_eq!(body["groupDeleted"], true);
        assert!(body.get("failed").is_none());

        let (status, _) = send(&app, request(Method::DELETE, &uri, Some(&f.admin_token), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_partial_group_delete_is_a_conflict_with_counts() {
        let (app, f) = setup_test_app().await;
        let g = f.group("G1").await;
        f.set(Some(vec![g.id])).await;
        f.user("free", vec![g.id]).await;
        let locked = f.user("locked", vec![g.id]).await;
        sqlx::query(&format!(
            "CREATE TRIGGER lock_user BEFORE UPDATE OF set_assignments ON users WHEN old.id = '{}' \
             BEGIN SELECT RAISE(ABORT, 'record locked'); END",
            locked.id
        ))
        .execute(&f.state.db)
        .await
        .unwrap();

        let uri = format!("/api/set-assignments/{}", g.id);
        let (status, body) = send(&app, request(Method::DELETE, &uri, Some(&f.admin_token), None)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["removedFromSets"], 1);
        assert_eq!(body["removedFromUsers"], 1);
        assert_eq!(body["groupDeleted"], false);
        assert_eq!(body["failed"].as_array().unwrap().len(), 1);
        assert_eq!(body["failed"][0]["id"], json!(locked.id));
        assert!(f.group_exists(g.id).await);
    }

    #[tokio::test]
    async fn test_bulk_add_and_member_listing() {
        let (app, f) = setup_test_app().await;
        let g = f.group("G").await;
        let s = f.set(Some(vec![])).await;
        let missing = Uuid::new_v4();

        let uri = format!("/api/set-assignments/{}/sets", g.id);
        let body = json!({ "set_ids": [s.id, { "_id": missing }] });
        let (status, report) = send(&app, request(Method::POST, &uri, Some(&f.admin_token), Some(body))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["changed"], json!([s.id]));
        assert_eq!(report["failed"][0]["id"], json!(missing));

        let uri = format!("/api/set-assignments/{}/members", g.id);
        let (status, members) = send(&app, request(Method::GET, &uri, Some(&f.admin_token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(members["sets"][0]["id"], json!(s.id));
        assert_eq!(members["users"], json!([]));
    }

    #[tokio::test]
    async fn test_authorized_sets_are_filtered_and_sorted() {
        let (app, f) = setup_test_app().await;
        let g = f.group("G").await;
        let hidden = f.set_named("Fluke", "Multimeter", Some(vec![])).await;
        let mine = f.set_named("Makita", "Bohrhammer", Some(vec![g.id])).await;
        let free = f.set_named("Bosch", "Akkuschrauber", None).await;
        let user = f.user("ausleiher", vec![g.id]).await;
        let token = f.token_for(user.id).await;

        let (status, body) = send(&app, request(Method::GET, "/api/sets/authorized", Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        let ids: Vec<Value> = body.as_array().unwrap().iter().map(|s| s["id"].clone()).collect();
        assert_eq!(ids, vec![json!(free.id), json!(mine.id)]);

        // a hidden set is forbidden to fetch directly
        let uri = format!("/api/sets/{}", hidden.id);
        let (status, _) = send(&app, request(Method::GET, &uri, Some(&token), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_form_update_handles_null_assignment() {
        let (app, f) = setup_test_app().await;
        let g = f.group("G").await;
        let set = f.set(Some(vec![g.id])).await;
        let uri = format!("/api/sets/{}", set.id);

        let (content_type, body) = multipart(&[("set_number", "42"), ("set_assignment", "null"), ("image", "ignored")]);
        let req = Request::builder()
            .method(Method::PUT)
            .uri(&uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", f.admin_token))
            .header(header::CONTENT_TYPE, content_type)
            .body(body)
            .unwrap();
        let (status, updated) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["set_number"], "42");
        assert_eq!(updated["assignment"], Value::Null);

        let assignment = json!([g.id]).to_string();
        let (content_type, body) = multipart(&[("set_assignment", assignment.as_str())]);
        let req = Request::builder()
            .method(Method::PUT)
            .uri(&uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", f.admin_token))
            .header(header::CONTENT_TYPE, content_type)
            .body(body)
            .unwrap();
        let (status, updated) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["assignment"], json!([g.id]));
        assert_eq!(updated["set_number"], "42");
    }

    #[tokio::test]
    async fn test_copy_commit_reports_issues() {
        let (app, f) = setup_test_app().await;
        let set = f.set(None).await;
        let uri = format!("/api/sets/{}/copy", set.id);

        let (status, mut draft) = send(&app, request(Method::GET, &uri, Some(&f.admin_token), None)).await;
        assert_eq!(status, StatusCode::OK);
        draft["products"] = json!([{ "designation": "GSR 12V", "electrical_test_required": true }]);

        let (status, body) = send(&app, request(Method::POST, &uri, Some(&f.admin_token), Some(draft.clone()))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let issues = body["error"]["details"]["issues"].as_array().unwrap();
        assert!(issues.iter().any(|i| i["field"] == "testing_interval" && i["item"] == 0));
        assert!(issues.iter().any(|i| i["field"] == "cost_center"));

        draft["products"] = json!([]);
        let (status, body) = send(&app, request(Method::POST, &uri, Some(&f.admin_token), Some(draft))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_ne!(body["set"]["id"], json!(set.id));
    }

    #[tokio::test]
    async fn test_direct_grant_routes() {
        let (app, f) = setup_test_app().await;
        let set = f.set(Some(vec![])).await;
        let user = f.user("ausleiher", vec![]).await;

        let uri = format!("/api/users/{}/sets/{}", user.id, set.id);
        let (status, body) = send(&app, request(Method::POST, &uri, Some(&f.admin_token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "changed");

        let token = f.token_for(user.id).await;
        let (_, me) = send(&app, request(Method::GET, &format!("/api/users/{}", user.id), Some(&token), None)).await;
        assert_eq!(me["set_assignments"], json!([set.id]));

        let (status, body) = send(&app, request(Method::DELETE, &uri, Some(&f.admin_token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "changed");
    }

    #[tokio::test]
    async fn test_metrics_track_group_creation() {
        let (app, f) = setup_test_app().await;
        f.group("G").await;

        let (status, body) = send(&app, request(Method::GET, "/metrics", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["groups_created"], 1);

        let response = app
            .oneshot(Request::builder().uri("/metrics/prometheus").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let text = response.into_body().collect().await.unwrap().to_bytes();
        assert!(String::from_utf8_lossy(&text).contains("ausleihe_groups_created 1"));
    }
}

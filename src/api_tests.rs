// src/api_tests.rs

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header::CONTENT_TYPE, Method, Request, StatusCode},
        Router,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::app;
    use crate::store::Store;
    use crate::workflow::WorkflowService;

    fn test_app() -> Router {
        app(WorkflowService::new(Arc::new(Store::new())))
    }

    fn request(
        method: Method,
        uri: &str,
        principal: Option<(&str, &str)>,
        body: Option<Value>,
    ) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some((employee_id, role)) = principal {
            builder = builder
                .header("x-employee-id", employee_id)
                .header("x-role", role)
                .header("x-department", "Engineering");
        }
        match body {
            Some(value) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn timesheet_body() -> Value {
        json!({
            "weekStartDate": "2024-01-01",
            "entries": [
                { "day": "Monday", "hours": 8.0, "project": "ProjA" },
                { "day": "Tuesday", "hours": 6.0, "project": "ProjB" }
            ]
        })
    }

    #[tokio::test]
    async fn requests_without_identity_headers_are_unauthorized() {
        let app = test_app();
        let response = app
            .oneshot(request(Method::GET, "/api/timesheets", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_role_header_is_unauthorized() {
        let app = test_app();
        let response = app
            .oneshot(request(
                Method::GET,
                "/api/timesheets",
                Some(("alice", "admin")),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_timesheet_round_trip() {
        let app = test_app();
        let response = app
            .oneshot(request(
                Method::POST,
                "/api/timesheets",
                Some(("alice", "employee")),
                Some(timesheet_body()),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = body_json(response).await;
        assert_eq!(body["message"], "Timesheet created successfully");
        assert_eq!(body["timesheet"]["totalHours"], 14.0);
        assert_eq!(body["timesheet"]["status"], "Draft");
        assert_eq!(body["timesheet"]["weekEndDate"], "2024-01-07");
    }

    #[tokio::test]
    async fn saving_the_same_week_twice_returns_ok_not_created() {
        let app = test_app();
        let principal = Some(("alice", "employee"));

        let first = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/api/timesheets",
                principal,
                Some(timesheet_body()),
            ))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app
            .oneshot(request(
                Method::POST,
                "/api/timesheets",
                principal,
                Some(timesheet_body()),
            ))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::OK);
        let body = body_json(second).await;
        assert_eq!(body["message"], "Timesheet updated successfully");
    }

    #[tokio::test]
    async fn validation_failures_list_every_field() {
        let app = test_app();
        let payload = json!({
            "weekStartDate": "not-a-date",
            "entries": [
                { "day": "Funday", "hours": 30.0, "project": "" }
            ]
        });

        let response = app
            .oneshot(request(
                Method::POST,
                "/api/timesheets",
                Some(("alice", "employee")),
                Some(payload),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        let errors = body["errors"].as_array().expect("errors array");
        assert_eq!(errors.len(), 4);
    }

    #[tokio::test]
    async fn submit_and_review_flow_over_http() {
        let app = test_app();
        let alice = Some(("alice", "employee"));
        let mona = Some(("mona", "manager"));

        let created = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/api/timesheets",
                alice,
                Some(timesheet_body()),
            ))
            .await
            .unwrap();
        let id = body_json(created).await["timesheet"]["id"]
            .as_str()
            .unwrap()
            .to_string();

        let submitted = app
            .clone()
            .oneshot(request(
                Method::POST,
                &format!("/api/timesheets/{id}/submit"),
                alice,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(submitted.status(), StatusCode::OK);

        // Reject without a reason is a validation failure.
        let rejected = app
            .clone()
            .oneshot(request(
                Method::POST,
                &format!("/api/timesheets/{id}/review"),
                mona,
                Some(json!({ "action": "reject" })),
            ))
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);

        let approved = app
            .oneshot(request(
                Method::POST,
                &format!("/api/timesheets/{id}/review"),
                mona,
                Some(json!({ "action": "approve" })),
            ))
            .await
            .unwrap();
        assert_eq!(approved.status(), StatusCode::OK);
        let body = body_json(approved).await;
        assert_eq!(body["timesheet"]["status"], "Approved");
        assert_eq!(body["timesheet"]["reviewedBy"], "mona");
    }

    #[tokio::test]
    async fn pending_listing_is_forbidden_for_employees() {
        let app = test_app();
        let response = app
            .oneshot(request(
                Method::GET,
                "/api/timesheets/pending",
                Some(("alice", "employee")),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn overlapping_time_off_is_a_conflict() {
        let app = test_app();
        let alice = Some(("alice", "employee"));
        let body = json!({
            "fromDate": "2024-02-01",
            "toDate": "2024-02-03",
            "reason": "Vacation"
        });

        let first = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/api/time-off",
                alice,
                Some(body.clone()),
            ))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);
        let created = body_json(first).await;
        assert_eq!(created["request"]["daysRequested"], 3);
        assert_eq!(created["request"]["status"], "Pending");

        let overlapping = json!({
            "fromDate": "2024-02-03",
            "toDate": "2024-02-05",
            "reason": "More vacation"
        });
        let second = app
            .oneshot(request(
                Method::POST,
                "/api/time-off",
                alice,
                Some(overlapping),
            ))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
        let body = body_json(second).await;
        assert_eq!(
            body["message"],
            "You already have a time off request for this period"
        );
    }

    #[tokio::test]
    async fn employees_cannot_read_others_records() {
        let app = test_app();
        let created = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/api/time-off",
                Some(("alice", "employee")),
                Some(json!({
                    "fromDate": "2024-02-01",
                    "toDate": "2024-02-03",
                    "reason": "Vacation"
                })),
            ))
            .await
            .unwrap();
        let id = body_json(created).await["request"]["id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .oneshot(request(
                Method::GET,
                &format!("/api/time-off/{id}"),
                Some(("bob", "employee")),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let app = test_app();
        let response = app
            .oneshot(request(
                Method::POST,
                "/api/timesheets/missing/review",
                Some(("mona", "manager")),
                Some(json!({ "action": "approve" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn status_endpoint_is_public() {
        let app = test_app();
        let response = app
            .oneshot(request(Method::GET, "/status", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
    }
}

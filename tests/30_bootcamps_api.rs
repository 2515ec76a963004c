mod common;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

fn bootcamp_body(name: &str) -> Value {
    json!({
        "name": name,
        "description": "Devworks is a full stack JavaScript Bootcamp located in the heart of Boston",
        "website": "https://devworks.com",
        "phone": "(111) 111-1111",
        "email": "enroll@devworks.com",
        "address": "233 Bay State Rd Boston MA 02215",
        "careers": ["Web Development", "UI/UX", "Business"],
        "housing": true,
        "jobAssistance": true,
    })
}

async fn create_bootcamp(client: &Client, server: &common::TestServer, token: &str, name: &str) -> Result<Value> {
    let res = client
        .post(server.url("/bootcamps"))
        .bearer_auth(token)
        .json(&bootcamp_body(name))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await?;
    Ok(body["data"].clone())
}

#[tokio::test]
async fn bootcamp_lifecycle_with_courses_and_reviews() -> Result<()> {
    let Some(server) = common::ensure_server().await? else {
        return Ok(());
    };
    let client = Client::new();

    let publisher = common::register(server, "Publisher", "publisher").await?;
    let name = format!("Devworks {}", uuid::Uuid::new_v4().simple());
    let bootcamp = create_bootcamp(&client, server, &publisher, &name).await?;
    let id = bootcamp["id"].as_str().context("bootcamp id")?.to_string();
    assert_eq!(bootcamp["photo"], "no-photo.jpg");
    assert!(bootcamp["slug"].as_str().unwrap_or_default().starts_with("devworks-"));

    // Courses drive averageCost
    for (title, tuition) in [("Front End", 8000), ("Full Stack", 10013)] {
        let res = client
            .post(server.url(&format!("/bootcamps/{}/courses", id)))
            .bearer_auth(&publisher)
            .json(&json!({
                "title": title,
                "description": "Learn it all",
                "weeks": 8,
                "tuition": tuition,
                "minimumSkill": "beginner",
            }))
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let shown: Value = client.get(server.url(&format!("/bootcamps/{}", id))).send().await?.json().await?;
    assert_eq!(shown["data"]["averageCost"].as_f64(), Some(9010.0));
    assert_eq!(shown["data"]["courses"].as_array().map(Vec::len), Some(2));
    assert!(shown["data"]["courses"][0].get("tuition").is_none());

    // Reviews drive averageRating; one per user
    let reviewer = common::register(server, "Reviewer", "user").await?;
    let review = json!({ "title": "Learned a ton", "text": "Great bootcamp", "rating": 8 });
    let res = client
        .post(server.url(&format!("/bootcamps/{}/reviews", id)))
        .bearer_auth(&reviewer)
        .json(&review)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .post(server.url(&format!("/bootcamps/{}/reviews", id)))
        .bearer_auth(&reviewer)
        .json(&review)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(server.url(&format!("/bootcamps/{}/reviews", id)))
        .bearer_auth(&publisher)
        .json(&review)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let reviews: Value = client
        .get(server.url(&format!("/bootcamps/{}/reviews", id)))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(reviews["count"], 1);

    let listed: Value = client
        .get(server.url("/bootcamps"))
        .query(&[("name", name.as_str()), ("select", "name,averageRating")])
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(listed["count"], 1);
    assert_eq!(listed["data"][0]["averageRating"].as_f64(), Some(8.0));
    assert_eq!(listed["pagination"], json!({}));

    // Only the owner (or an admin) may change it
    let stranger = common::register(server, "Stranger", "publisher").await?;
    let res = client
        .put(server.url(&format!("/bootcamps/{}", id)))
        .bearer_auth(&stranger)
        .json(&json!({ "housing": false }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .delete(server.url(&format!("/bootcamps/{}", id)))
        .bearer_auth(&publisher)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(server.url(&format!("/bootcamps/{}/courses", id))).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn users_cannot_publish_bootcamps() -> Result<()> {
    let Some(server) = common::ensure_server().await? else {
        return Ok(());
    };
    let user = common::register(server, "Plain User", "user").await?;

    let res = Client::new()
        .post(server.url("/bootcamps"))
        .bearer_auth(&user)
        .json(&bootcamp_body("Never Created"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "User role [user] is not authorized to access this route");
    Ok(())
}

#[tokio::test]
async fn missing_bootcamp_is_not_found() -> Result<()> {
    let Some(server) = common::ensure_server().await? else {
        return Ok(());
    };
    let id = uuid::Uuid::new_v4();
    let res = Client::new().get(server.url(&format!("/bootcamps/{}", id))).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], format!("Bootcamp not found with id of {}", id));
    Ok(())
}

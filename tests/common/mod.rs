//! Common test utilities

#![allow(dead_code)]

use foro_core::api::{ForumApiClient, TokenStore};
use foro_core::config::ApiConfig;
use foro_core::domain::{Identity, IdentitySession};
use serde_json::{json, Value};

pub fn test_api_config(base_url: &str) -> ApiConfig {
    ApiConfig {
        base_url: base_url.to_string(),
        timeout_secs: 5,
        token_cache_ms: 5_000,
        max_upload_bytes: 1024,
    }
}

pub fn create_test_client(base_url: &str) -> (ForumApiClient, TokenStore) {
    let tokens = TokenStore::new();
    let client = ForumApiClient::new(test_api_config(base_url), tokens.clone())
        .expect("client should build");
    (client, tokens)
}

pub fn ana() -> Identity {
    Identity::new("auth0|abc")
        .with_email("ana@example.com")
        .with_name("Ana")
        .with_picture("https://example.com/ana.png")
}

pub fn signed_in_as(identity: Identity) -> IdentitySession {
    IdentitySession::authenticated(identity)
}

pub fn user_json(id: i64, subject: &str) -> Value {
    json!({
        "id": id,
        "email": "ana@example.com",
        "nombre": "Ana",
        "imagen": "https://example.com/ana.png",
        "auth0Id": subject,
        "fechaCreacion": "2024-03-01T10:15:30"
    })
}

pub fn topic_json(id: i64, title: &str) -> Value {
    json!({
        "id": id,
        "titulo": title,
        "descripcion": "About ownership",
        "autor": user_json(1, "auth0|abc"),
        "fechaCreacion": "2024-03-02T08:00:00",
        "cantidadMensajes": 2
    })
}

pub fn message_json(id: i64, topic_id: i64, text: &str) -> Value {
    json!({
        "id": id,
        "texto": text,
        "autor": user_json(1, "auth0|abc"),
        "tema": topic_json(topic_id, "Rust"),
        "fechaCreacion": "2024-03-02T09:00:00"
    })
}

pub fn page_json(content: Vec<Value>, number: u32, size: u32, total_elements: u64) -> Value {
    let total_pages = total_elements.div_ceil(size as u64) as u32;
    json!({
        "content": content,
        "totalElements": total_elements,
        "totalPages": total_pages,
        "size": size,
        "number": number,
        "first": number == 0,
        "last": total_pages == 0 || number + 1 >= total_pages
    })
}

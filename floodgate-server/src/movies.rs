//! The movies resource.
//!
//! Persistence and request-body validation rules live behind external
//! collaborators; the in-memory store here is just enough to drive the
//! throttle pipeline and the task supervisor end to end.

use crate::http::{AppState, error_response};
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Serialize)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub year: i32,
    pub runtime: i32,
    pub genres: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMovie {
    pub title: String,
    pub year: i32,
    pub runtime: i32,
    #[serde(default)]
    pub genres: Vec<String>,
}

/// In-memory movie storage with auto-incrementing ids
#[derive(Clone, Default)]
pub struct MovieStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    movies: HashMap<i64, Movie>,
}

impl MovieStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, input: CreateMovie) -> Movie {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.next_id += 1;
        let movie = Movie {
            id: inner.next_id,
            title: input.title,
            year: input.year,
            runtime: input.runtime,
            genres: input.genres,
        };
        inner.movies.insert(movie.id, movie.clone());
        movie
    }

    pub fn get(&self, id: i64) -> Option<Movie> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .movies
            .get(&id)
            .cloned()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .movies
            .len()
    }
}

pub async fn create_movie(
    State(state): State<AppState>,
    Json(input): Json<CreateMovie>,
) -> Response {
    let movie = state.movies.insert(input);
    tracing::info!(id = movie.id, title = %movie.title, "movie created");

    // Notification delivery happens off the request path; its failure is
    // the supervisor's to log, never this response's.
    let notifier = state.notifier.clone();
    let created = movie.clone();
    state.supervisor.spawn("movie-created-notification", async move {
        notifier.movie_created(&created).await
    });

    let location = format!("/v1/movies/{}", movie.id);
    (
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(json!({ "movie": movie })),
    )
        .into_response()
}

pub async fn show_movie(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.movies.get(id) {
        Some(movie) => Json(json!({ "movie": movie })).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            "the requested resource could not be found",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(title: &str) -> CreateMovie {
        CreateMovie {
            title: title.to_string(),
            year: 1986,
            runtime: 102,
            genres: vec!["drama".to_string()],
        }
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let store = MovieStore::new();
        let first = store.insert(input("Stand by Me"));
        let second = store.insert(input("Blue Velvet"));

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_get_missing_movie() {
        let store = MovieStore::new();
        assert!(store.get(42).is_none());
    }

    #[test]
    fn test_get_returns_inserted_movie() {
        let store = MovieStore::new();
        let created = store.insert(input("Stand by Me"));

        let fetched = store.get(created.id).unwrap();
        assert_eq!(fetched.title, "Stand by Me");
        assert_eq!(fetched.year, 1986);
    }
}

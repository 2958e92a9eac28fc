//! OMERO.web adapter: login, scope resolution, and the repository
//! operations over the JSON API and webclient endpoints.
//!
//! All calls block. Cookies from the login carry the server session; the
//! CSRF token travels in the [`ScopedSession`](limsync_core::ScopedSession).

pub mod api;
pub mod client;

pub use client::OmeroWebClient;

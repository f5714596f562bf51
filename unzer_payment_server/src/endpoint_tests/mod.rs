mod helpers;

mod admin;
mod sessions;
mod webhooks;

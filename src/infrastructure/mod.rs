pub mod api_clients;
pub mod config;
pub mod db;
pub mod security;

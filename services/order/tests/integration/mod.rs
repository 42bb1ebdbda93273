mod common;
mod web;

pub mod home_controller;
pub mod webhook_controller;
pub mod commands;
pub mod cron_controller;
pub mod alchemy_controller;

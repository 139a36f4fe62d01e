mod app;
mod config;
mod games;
mod input;
mod model;
mod render;
mod shop;
mod sim;
mod storage;
mod weather;

use anyhow::Result;

fn main() -> Result<()> {
    app::run()
}

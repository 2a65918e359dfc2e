//! Management CLI for mysite (equivalent to Django's manage.py).

use mysite::commands::execute_from_command_line;
use std::process;

#[tokio::main]
async fn main() {
	if let Err(e) = execute_from_command_line().await {
		eprintln!("Error: {:#}", e);
		process::exit(1);
	}
}

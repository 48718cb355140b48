mod scenarios;
mod teardown;

//! Commented default config written on first run.

pub(super) fn default_config_toml() -> &'static str {
    r##"# Lectern Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[server]
# bind = "0.0.0.0"
# port = 3000               # 1-65535, the PORT env var wins when set
# outbound_buffer = 256     # 1-65536 queued events per participant
# hello_timeout_secs = 10   # 1-300

[storage]
# upload_dir = "uploads"
# max_upload_mb = 50        # 1-1024
# allowed_extensions = ["pdf"]

[viewer]
# url = "ws://127.0.0.1:3000/"
# reconnect_delay_secs = 1
# max_reconnect_delay_secs = 30
# fetch_timeout_secs = 15   # 1-600

[logging]
# level = "info"            # trace, debug, info, warn, error
"##
}

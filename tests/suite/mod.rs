mod http_oracle;
mod offline;
mod play;

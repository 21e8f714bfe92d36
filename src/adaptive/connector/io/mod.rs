pub mod csv_table;
pub mod notify;
pub mod request;
pub mod response;
pub mod transport;
pub mod warehouse;

pub mod chat_page;
pub mod error_banner;
pub mod fortune_page;
pub mod graph_page;
pub mod header;
pub mod photos_page;
pub mod profiles_page;
pub mod review_panel;
pub mod stage_indicator;
pub mod upload_area;

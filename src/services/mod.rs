pub mod ai_service;
pub mod candidate_service;
pub mod notification_service;
pub mod queue_service;
pub mod report_service;
pub mod scoring;

pub mod claims_dto;
pub mod draft_dto;
pub mod player_dto;
pub mod session_dto;
pub mod team_dto;
pub mod transfer_dto;

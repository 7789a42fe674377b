pub mod certificate;
pub mod declaration;
pub mod doctor;
pub mod patient;

pub mod belongs_to_factory;
pub mod belongs_to_relation;
pub mod has_many_factory;
pub mod has_many_relation;
pub mod has_one_relation;
pub mod nested_properties;
pub mod repository;

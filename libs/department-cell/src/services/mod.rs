pub mod department;

pub use department::DepartmentService;

mod addrobj;
mod house;
mod socrbase;

pub use addrobj::AddrObj;
pub use house::House;
pub use socrbase::SocrBase;

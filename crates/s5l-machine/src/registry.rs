use s5l_soc::SocVariant;

pub const GIB: u64 = 1024 * 1024 * 1024;

/// A selectable board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub soc: SocVariant,
    pub default_cpus: u8,
    pub min_cpus: u8,
    pub max_cpus: u8,
    /// The only RAM size the board accepts.
    pub ram_size: u64,
}

/// Read-only table of the boards this crate can build, queried by name.
#[derive(Debug, Clone)]
pub struct MachineRegistry {
    machines: Vec<MachineSpec>,
}

impl MachineRegistry {
    pub fn builtin() -> Self {
        let iphone5 = |name, soc| MachineSpec {
            name,
            description: "Apple iPhone 5 (N42AP)",
            soc,
            default_cpus: 2,
            min_cpus: 2,
            max_cpus: 2,
            ram_size: GIB,
        };
        Self {
            machines: vec![
                iphone5("iphone-n42ap", SocVariant::S5l8950x),
                MachineSpec {
                    description: "Apple iPhone 5 (N42AP), bring-up SoC",
                    ..iphone5("iphone-n42ap-minimal", SocVariant::S5l8950)
                },
            ],
        }
    }

    pub fn get(&self, name: &str) -> Option<&MachineSpec> {
        self.machines.iter().find(|m| m.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MachineSpec> + '_ {
        self.machines.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.machines.iter().map(|m| m.name).collect()
    }
}

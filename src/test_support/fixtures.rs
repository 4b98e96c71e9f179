//! Recipe fixtures for common test scenarios.

use std::path::Path;

use crate::core::dependency::DependencyDecl;
use crate::core::recipe::Recipe;
use crate::resolver::RequirementRule;

/// Recipe of a GUI library with platform-dependent backends.
pub const LXGUI_RECIPE: &str = include_str!("../../recipes/lxgui/Berth.toml");

/// Recipe of a vendored header-only library.
pub const OUP_RECIPE: &str = include_str!("../../recipes/observable_unique_ptr/Berth.toml");

fn parse(content: &str, dir: &str) -> Recipe {
    Recipe::parse(content, &Path::new("recipes").join(dir).join("Berth.toml"))
        .unwrap_or_else(|e| panic!("fixture recipe `{}` is invalid: {:#}", dir, e))
}

/// The lxgui recipe.
pub fn lxgui() -> Recipe {
    parse(LXGUI_RECIPE, "lxgui")
}

/// The observable_unique_ptr recipe.
pub fn observable_unique_ptr() -> Recipe {
    parse(OUP_RECIPE, "observable_unique_ptr")
}

fn decl(reference: &str) -> DependencyDecl {
    DependencyDecl::parse(reference).unwrap_or_else(|e| panic!("bad fixture reference: {}", e))
}

/// Two `sdl` rules with different ranges, the later one forced.
pub fn sdl_override() -> Recipe {
    Recipe::new("sdl_override")
        .with_requirement(RequirementRule::always(decl("sdl/[>=2 <3]")))
        .with_requirement(RequirementRule::always(
            decl("sdl/[>=2.26 <3]").forced().with_transitive_headers(false),
        ))
}

/// Two `sdl` rules with different ranges, neither forced.
pub fn sdl_conflict() -> Recipe {
    Recipe::new("sdl_conflict")
        .with_requirement(RequirementRule::always(decl("sdl/[>=2 <3]")))
        .with_requirement(RequirementRule::always(decl("sdl/[>=2.26 <3]")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_load() {
        let lxgui = lxgui();
        assert_eq!(lxgui.options().len(), 6);
        assert_eq!(lxgui.requires().len(), 17);
        assert_eq!(lxgui.tool_requires().len(), 1);

        let oup = observable_unique_ptr();
        assert_eq!(oup.package_files().len(), 2);
        assert_eq!(oup.package().min_cppstd, Some(17));
    }
}

use std::path::PathBuf;

use monthdash_core::{
    load_analysis_control, load_brands, AnalysisKind, BrandRegistry, Cluster, MediaType,
};

fn repo_config(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../config")
        .join(name)
}

#[test]
fn shipped_brands_file_is_valid() {
    let brands = load_brands(&repo_config("brands.yaml")).unwrap();
    let registry = BrandRegistry::new(&brands);

    assert_eq!(registry.resolve(MediaType::Ads, "Rimi Lietuva"), "Rimi");
    assert_eq!(registry.resolve(MediaType::Pr, "Ozas"), "OZAS");
    assert_eq!(registry.cluster_of("Vilnius Akropolis"), Some(Cluster::AkropolisLocation));
    assert_eq!(registry.cluster_of("G9"), Some(Cluster::OtherCity));
}

#[test]
fn shipped_control_file_is_valid() {
    let control = load_analysis_control(&repo_config("analysis_control.yaml")).unwrap();

    assert!(control.is_enabled(MediaType::SocialMedia, AnalysisKind::ContentPillars));
    assert!(control.is_enabled(MediaType::SocialMedia, AnalysisKind::AudienceAffinity));
    assert!(!control.is_enabled(MediaType::Ads, AnalysisKind::Creativity));
    assert!(!control.pr_agility());
    assert_eq!(
        control.active_media().into_iter().collect::<Vec<_>>(),
        vec![MediaType::SocialMedia]
    );
}

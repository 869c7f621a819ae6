use super::*;

struct FixedScene {
    id: &'static str,
    claims: &'static str,
}

impl Scene for FixedScene {
    fn id(&self) -> &str {
        self.id
    }

    fn compose(&self, request: &RenderRequest) -> ReelResult<CompositionDescriptor> {
        Ok(CompositionDescriptor {
            scene_id: self.claims.to_string(),
            canvas: Canvas {
                width: 16,
                height: 16,
            },
            fps: Fps::new(30, 1)?,
            duration: FrameIndex(2),
            still_frame: FrameIndex(0),
            props: request.to_sorted(),
        })
    }

    fn paint(
        &self,
        comp: &CompositionDescriptor,
        _frame: FrameIndex,
    ) -> ReelResult<image::RgbaImage> {
        Ok(image::RgbaImage::new(comp.canvas.width, comp.canvas.height))
    }
}

#[test]
fn unknown_scene_is_composition_not_found() {
    let reg = SceneRegistry::with_builtin(".");
    let err = reg
        .compile("Missing", &RenderRequest::default())
        .unwrap_err();
    assert!(matches!(err, ReelError::CompositionNotFound(_)));
    assert!(err.to_string().contains("Scene"));
}

#[test]
fn builtin_scene_is_registered() {
    let reg = SceneRegistry::with_builtin(".");
    assert_eq!(reg.ids().collect::<Vec<_>>(), vec!["Scene"]);
    let comp = reg
        .compile("Scene", &RenderRequest::from_pairs([("text", "HELLO")]))
        .unwrap();
    assert_eq!(comp.frame_count(), 60);
}

#[test]
fn props_are_threaded_into_the_descriptor() {
    let mut reg = SceneRegistry::new();
    reg.register(Arc::new(FixedScene {
        id: "fixed",
        claims: "fixed",
    }));
    let comp = reg
        .compile(
            "fixed",
            &RenderRequest::from_pairs([("b", "2"), ("a", "1")]),
        )
        .unwrap();
    assert_eq!(
        comp.props.into_iter().collect::<Vec<_>>(),
        vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string())
        ]
    );
}

#[test]
fn mislabelled_descriptor_is_rejected() {
    let mut reg = SceneRegistry::new();
    reg.register(Arc::new(FixedScene {
        id: "fixed",
        claims: "other",
    }));
    assert!(reg.compile("fixed", &RenderRequest::default()).is_err());
}

#[test]
fn descriptor_validation_catches_bad_values() {
    let good = CompositionDescriptor {
        scene_id: "s".to_string(),
        canvas: Canvas {
            width: 10,
            height: 10,
        },
        fps: Fps::new(30, 1).unwrap(),
        duration: FrameIndex(2),
        still_frame: FrameIndex(1),
        props: BTreeMap::new(),
    };
    assert!(good.validate().is_ok());

    let odd = CompositionDescriptor {
        canvas: Canvas {
            width: 11,
            height: 10,
        },
        ..good.clone()
    };
    assert!(odd.validate().is_err());

    let empty = CompositionDescriptor {
        duration: FrameIndex(0),
        still_frame: FrameIndex(0),
        ..good.clone()
    };
    assert!(empty.validate().is_err());

    let still_outside = CompositionDescriptor {
        still_frame: FrameIndex(2),
        ..good
    };
    assert!(still_outside.validate().is_err());
}
